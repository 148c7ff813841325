mod copy_job_tests;
