//! ABOUTME: Repository modules for database entities
//! ABOUTME: Each repository wraps queries for one area of the schema

pub mod activity;
pub mod content;
pub mod playlists;
pub mod songs;
pub mod users;
