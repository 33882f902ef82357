pub mod deferred_acceptance;
