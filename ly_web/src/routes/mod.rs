//! ABOUTME: HTTP route handlers grouped by API area

pub mod activity;
pub mod auth;
pub mod misc;
pub mod music;
pub mod playlists;
