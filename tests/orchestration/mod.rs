mod dispatch_failure_tests;
mod reaper_tests;
mod resubmission_tests;
