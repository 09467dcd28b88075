use git_quill::logger;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_initializes_once() {
        assert!(logger::init().is_ok());
        assert!(logger::init().is_ok());
        logger::enable_logging();
        logger::set_log_to_stdout(true);
        logger::disable_logging();
    }
}
