mod test_backoff_until_failed;
mod test_close_is_idempotent;
