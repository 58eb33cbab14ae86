//! Infrastructure layer - persistence and chat delivery

pub mod storage;
pub mod telegram;
