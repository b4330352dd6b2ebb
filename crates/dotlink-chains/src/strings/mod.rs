// SPDX-License-Identifier: GPL-3.0

//! Centralized string constants for the dotlink-chains crate.

pub mod rpc;
