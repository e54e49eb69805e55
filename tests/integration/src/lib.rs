//! Integration test crate — see tests/ for the cross-crate scenarios.
