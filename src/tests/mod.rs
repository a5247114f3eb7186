//! End-to-end sweep tests against a wiremock recordings API.

mod sweep_e2e;
