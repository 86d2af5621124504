pub(crate) mod treasury_tests;
