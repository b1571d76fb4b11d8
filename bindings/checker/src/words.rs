use rand::seq::SliceRandom;
use rand::Rng;

const WORDS: &[&str] = &[
    "スポーツ",
    "sports",
    "募集",
    "ダイエット",
    "travel",
    "旅行",
    "海外",
    "foods",
    "食事",
    "美味しい",
    "おすすめ",
];

/// A word that appears in the seeded tweets, used for searches and hashtags.
pub fn random_word() -> &'static str {
    WORDS.choose(&mut rand::thread_rng()).copied().unwrap_or("travel")
}

pub fn random_int_string() -> String {
    rand::thread_rng().gen_range(0..10_000).to_string()
}

/// A random lowercase password of 4 to 7 letters, for login attempts that must fail.
pub fn random_pass() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(4..8);
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}
