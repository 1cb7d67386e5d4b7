//! Random login and password generation for new accounts.

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;

/// Length of passwords produced by [`generate_password`].
pub const PASSWORD_LENGTH: usize = 18;

const ADJECTIVES: &[&str] = &[
    "amber", "ancient", "bold", "brave", "breezy", "bright", "calm", "clever", "cosmic", "crimson",
    "curious", "daring", "dusty", "eager", "early", "fancy", "fuzzy", "gentle", "giant", "golden",
    "happy", "hidden", "humble", "icy", "jolly", "keen", "lively", "lucky", "mellow", "misty",
    "nimble", "noble", "polar", "proud", "quiet", "rapid", "rusty", "shiny", "silent", "sleepy",
    "snowy", "solar", "sunny", "swift", "tidy", "velvet", "wild", "witty", "young", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "bison", "canyon", "cedar", "comet", "cricket", "dolphin", "falcon",
    "fern", "finch", "forest", "fox", "glacier", "harbor", "hawk", "heron", "island", "jaguar",
    "koala", "lagoon", "lantern", "lynx", "maple", "meadow", "meteor", "moose", "nebula", "otter",
    "owl", "panda", "pebble", "pine", "quartz", "raven", "reef", "river", "robin", "sparrow",
    "spruce", "summit", "thunder", "tiger", "tundra", "valley", "walrus", "willow", "wolf", "yak",
    "zephyr",
];

const DELIMITERS: &[&str] = &["", ".", "_"];

/// Produces the local part (before `@`) of new mailbox addresses.
///
/// Any `Fn() -> String` closure is a generator, so callers can plug in their
/// own naming scheme with [`ClientBuilder::login_generator`](crate::ClientBuilder::login_generator).
pub trait LoginGenerator: Send + Sync {
    /// Return a fresh login.
    fn generate_login(&self) -> String;
}

impl<F> LoginGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate_login(&self) -> String {
        self()
    }
}

/// Default generator: an adjective and a noun joined by `""`, `"."` or `"_"`,
/// with 2 to 6 digits placed either in front or at the end.
///
/// ```
/// use mailtm_client::{LoginGenerator, WordlistLogin};
///
/// let login = WordlistLogin.generate_login();
/// assert!(login.chars().any(|c| c.is_ascii_digit()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WordlistLogin;

impl LoginGenerator for WordlistLogin {
    fn generate_login(&self) -> String {
        let mut rng = rand::rng();

        let digits: String = (0..rng.random_range(2..=6))
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        let digits_last = rng.random_bool(0.5);

        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("quiet");
        let delimiter = DELIMITERS.choose(&mut rng).copied().unwrap_or("");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("otter");

        if digits_last {
            format!("{adjective}{delimiter}{noun}{digits}")
        } else {
            format!("{digits}{adjective}{delimiter}{noun}")
        }
    }
}

/// Generate a random password of ASCII letters and digits.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}
