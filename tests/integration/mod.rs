//! Integration tests for provenance graph checking and repair

mod fsck_scenarios;
mod test_utils;
