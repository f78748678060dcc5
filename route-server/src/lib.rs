//! Commuter route finder server.
//!
//! Answers: "I am standing here and want to get there. Which fixed transit
//! route (or pair of routes) do I ride, where do I board, where do I get
//! off, and what will it cost?"

pub mod cache;
pub mod cases;
pub mod domain;
pub mod fare;
pub mod finder;
pub mod geometry;
pub mod network;
pub mod store;
pub mod web;
