mod test_acquire_fallback;
