mod cache_monitor_tests;
mod entity_lookup_tests;
mod statistics_tests;
mod task_query_tests;
mod task_submission_tests;
