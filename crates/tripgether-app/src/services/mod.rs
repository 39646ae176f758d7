// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer. Wires the platform bridge, configuration and hand-off
// crate together for the two entry points.

pub mod app_services;
pub mod data_dir;
pub mod sharing_service;
