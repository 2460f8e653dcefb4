use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub title: String,
    pub text: String,
    pub rating: u8,
}

impl NewReview {
    pub fn rating_in_range(rating: u8) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&rating)
    }
}

pub const PROTECTED_FIELDS: &[&str] = &["bootcamp"];
