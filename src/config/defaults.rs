// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Values used when callwire.yaml leaves a key out.

pub const PROVIDER_BASE_URL: &str = "https://api.openai.com";

pub const ESTABLISH_TIMEOUT_MS: u64 = 30_000;
pub const IDLE_TIMEOUT_MS: u64 = 60_000;

pub const PREVIEW_TIMEOUT_MS: u64 = 10_000;
pub const PREVIEW_MAX_REDIRECTS: usize = 5;
// Some sites serve meta tags only to browser-like agents.
pub const PREVIEW_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub const SESSION_TTL_SECS: u64 = 3_600;
pub const SESSION_MAX_HISTORY: usize = 50;
pub const SESSION_MAX_SESSIONS: usize = 10_000;

pub const OTT_QUESTION: &str = "Which OTT services do you use with your plan?";
pub const OTT_SERVICES: &[&str] = &["Netflix", "Disney+", "TVING", "WATCHA"];
pub const OX_OPTIONS: &[&str] = &["Yes", "No"];
