mod client;
mod models;

pub use client::TelegramUploader;
pub use models::{FileRef, Message, PhotoSize, ResponseParameters, TelegramResponse, User};
