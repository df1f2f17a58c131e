#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use rskafka_mixed_instance::protocol::messages::{MemberAssignment, Subscription};
use rskafka_mixed_instance::protocol::traits::ReadType;
use rskafka_mixed_instance::{GroupMember, MemberMetadata};

fuzz_target!(|data: &[u8]| {
    // anything that decodes must encode back to the same bytes
    if let Ok(metadata) = MemberMetadata::decode(data) {
        assert_eq!(metadata.encode(), data);
    }

    let _ = Subscription::read(&mut Cursor::new(data));
    let _ = MemberAssignment::read(&mut Cursor::new(data));
    let _ = GroupMember::from_subscription("member", data);
});
