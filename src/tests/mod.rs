//! Session and end-to-end tests
