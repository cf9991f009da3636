pub mod clipboard;
pub mod gesture;
pub mod instance;
pub mod launcher;
pub mod logging;
pub mod menu;
pub mod service;
pub mod settings;
mod storage;
pub mod usage;
