#![no_main]
use libfuzzer_sys::fuzz_target;
use vcatch_protocol::{AuthArgs, Command, HeloArgs, MailFromArgs, RcptToArgs};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Command { args, .. } = Command::parse(line);

    let _ = HeloArgs::try_from(args.clone());
    let _ = MailFromArgs::try_from(args.clone());
    let _ = RcptToArgs::try_from(args.clone());
    let _ = AuthArgs::try_from(args);
});
