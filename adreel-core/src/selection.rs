use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

/// How one advertisement is picked out of the eligible set
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Uniform choice across the eligible set
    #[default]
    Random,
    /// First eligible ad in store order
    First,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::Random => "random",
            SelectionPolicy::First => "first",
        }
    }

    pub fn select_one<'a, T>(&self, eligible: &'a [T]) -> Option<&'a T> {
        self.select_one_with(eligible, &mut rand::thread_rng())
    }

    pub fn select_one_with<'a, T, R>(&self, eligible: &'a [T], rng: &mut R) -> Option<&'a T>
    where
        R: Rng + ?Sized,
    {
        match self {
            SelectionPolicy::Random => eligible.choose(rng),
            SelectionPolicy::First => eligible.first(),
        }
    }
}
