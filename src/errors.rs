error_chain! {
    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        ConnectError(addr: String, what: String) {
            description("cannot connect to the BOINC client")
            display("cannot connect to {}: {}", addr, what)
        }
        ProtocolError(what: String) {
            description("unexpected reply from the BOINC client")
            display("protocol error: {}", what)
        }
        DataParseError(what: String) {
            description("data parsing failed")
            display("data parsing failed: {}", what)
        }
        AuthError(what: String) {
            description("authentication error")
            display("authentication error: {}", what)
        }
        ConfigError(what: String) {
            description("invalid configuration")
            display("invalid configuration: {}", what)
        }
    }
}
