pub(crate) mod costbasis_engine_tests;
