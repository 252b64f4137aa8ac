// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod message;
pub mod preview;
pub mod provider;
pub mod registry;
pub mod repair;
pub mod server;
pub mod session;
pub mod stream;
