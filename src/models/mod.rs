//! Data models for the forecast server

pub mod reservation;
