//! Random store names
//!
//! Used to pre-fill the store picker. Names are not checked for
//! uniqueness; two visitors may well end up in the same store.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "adorable", "beautiful", "clean", "drab", "elegant", "fancy", "glamorous", "handsome",
    "long", "magnificent", "old", "plain", "quaint", "sparkling", "unsightly", "angry",
    "bewildered", "clumsy", "defeated", "embarrassed", "fierce", "grumpy", "helpless",
    "itchy", "jealous", "lazy", "mysterious", "nervous", "obnoxious", "panicky",
    "repulsive", "scary", "thoughtless", "uptight", "worried", "agreeable", "brave",
    "calm", "delightful", "eager", "faithful", "gentle", "happy", "jolly", "kind",
    "lively", "nice", "obedient", "proud", "relieved", "silly", "thankful", "victorious",
    "witty", "zealous",
];

const ANIMALS: &[&str] = &[
    "anchovy", "barracuda", "catfish", "dolphin", "eel", "flounder", "grouper", "haddock",
    "halibut", "jellyfish", "kingfish", "lobster", "mackerel", "narwhal", "octopus",
    "pike", "pufferfish", "salmon", "sardine", "scallop", "seahorse", "shark", "shrimp",
    "squid", "starfish", "sturgeon", "swordfish", "trout", "tuna", "turtle", "walrus",
    "whale", "wrasse",
];

/// Generate a random store name like `jolly-narwhal-42`
pub fn fun_name() -> String {
    fun_name_with(&mut rand::thread_rng())
}

/// Generate a store name from the given random source
pub fn fun_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let animal = ANIMALS[rng.gen_range(0..ANIMALS.len())];
    let number: u8 = rng.gen_range(1..100);
    format!("{}-{}-{}", adjective, animal, number)
}
