pub mod anilist;
pub mod cache;
pub mod guessit;
pub mod token;
