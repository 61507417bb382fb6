// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module

mod mac_identity;
mod plan_shape;
mod template_rendering;
