pub mod testcase_model;
