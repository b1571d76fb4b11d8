use rand::seq::SliceRandom;
use rand::Rng;

/// Credentials of one seeded user of the target application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub password: String,
}

impl Account {
    /// The target's seed data derives every password from the account name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let password = password_for(&name);
        Self { name, password }
    }
}

/// Shift every letter one place forward, wrapping `z` to `a` and `Z` to `A`.
///
/// Characters outside the letter ranges are moved back by 25, which is what the seeded password
/// column contains. A character that would leave the valid range is kept as is.
pub fn password_for(name: &str) -> String {
    name.chars()
        .map(|c| {
            let shifted = if ('`'..='y').contains(&c) || ('@'..='Y').contains(&c) {
                (c as u32).checked_add(1)
            } else {
                (c as u32 + 1).checked_sub(26)
            };
            shifted.and_then(char::from_u32).unwrap_or(c)
        })
        .collect()
}

/// The set of accounts a benchmark run can log in as.
#[derive(Debug, Clone, Default)]
pub struct AccountPool {
    accounts: Vec<Account>,
}

impl AccountPool {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: names.into_iter().map(Account::new).collect(),
        }
    }

    /// Parse a list of account names separated by commas or newlines. Blank entries are skipped.
    pub fn parse(input: &str) -> Self {
        Self::from_names(
            input
                .split([',', '\n'])
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// A freshly shuffled copy of the pool, so that each run hands out users in a new order.
    pub fn shuffled(&self) -> anyhow::Result<Vec<Account>> {
        self.shuffled_with(&mut rand::thread_rng())
    }

    pub fn shuffled_with<R: Rng + ?Sized>(&self, rng: &mut R) -> anyhow::Result<Vec<Account>> {
        if self.accounts.is_empty() {
            anyhow::bail!("user data not found");
        }

        let mut accounts = self.accounts.clone();
        accounts.shuffle(rng);
        Ok(accounts)
    }
}
