/*
 * Errand - Sandboxed Single-Shot Gemini Agent
 * File Path: src/lib.rs
 * Responsibility: Shared library modules
 */

pub mod agent;
pub mod config;
pub mod llm;
pub mod sandbox;
pub mod tools;
