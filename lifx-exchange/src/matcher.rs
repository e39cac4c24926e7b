//! Correlation of inbound replies with the exchange waiting for them.

use lifx_protocol::{HardwareAddress, Message, MessageType};

use crate::session::SessionId;

/// Which device a reply may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPolicy {
    /// Only the given device. A reply carrying the all-zero address is
    /// accepted too, since some firmware answers that way.
    Exact(HardwareAddress),
    /// Any device, as for broadcast exchanges
    Any,
}

/// Why a decoded reply was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnexpectedType(MessageType),
    ForeignSession(u32),
    WrongTarget(HardwareAddress),
}

/// Accept/reject decision for one in-flight exchange.
#[derive(Debug, Clone)]
pub struct Matcher {
    expected: Vec<MessageType>,
    session: SessionId,
    policy: TargetPolicy,
}

impl Matcher {
    pub fn new(expected: &[MessageType], session: SessionId, policy: TargetPolicy) -> Self {
        Self {
            expected: expected.to_vec(),
            session,
            policy,
        }
    }

    pub fn expected(&self) -> &[MessageType] {
        &self.expected
    }

    pub fn check(&self, reply: &Message) -> Result<(), Rejection> {
        let kind = reply.message_type();
        if !self.expected.contains(&kind) {
            return Err(Rejection::UnexpectedType(kind));
        }
        if reply.source != self.session.value() {
            return Err(Rejection::ForeignSession(reply.source));
        }
        match self.policy {
            TargetPolicy::Any => Ok(()),
            TargetPolicy::Exact(target) if reply.target == target || reply.target.is_broadcast() => {
                Ok(())
            }
            TargetPolicy::Exact(_) => Err(Rejection::WrongTarget(reply.target)),
        }
    }

    pub fn accepts(&self, reply: &Message) -> bool {
        self.check(reply).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifx_protocol::Payload;
    use proptest::prelude::*;
    use rstest::rstest;

    const BULB: HardwareAddress = HardwareAddress::new([0xd0, 0x73, 0xd5, 0x00, 0x00, 0x01]);
    const OTHER: HardwareAddress = HardwareAddress::new([0xd0, 0x73, 0xd5, 0x00, 0x00, 0x02]);

    fn session() -> SessionId {
        SessionId::new(1234).unwrap()
    }

    fn power_reply(source: u32, from: HardwareAddress) -> Message {
        Message::new(Payload::StatePower { level: 65535 })
            .with_source(source)
            .with_target(from)
    }

    #[rstest]
    #[case(BULB, true)]
    #[case(HardwareAddress::BROADCAST, true)]
    #[case(OTHER, false)]
    fn test_exact_policy(#[case] from: HardwareAddress, #[case] accepted: bool) {
        let matcher = Matcher::new(&[MessageType::StatePower], session(), TargetPolicy::Exact(BULB));
        assert_eq!(matcher.accepts(&power_reply(1234, from)), accepted);
    }

    #[test]
    fn test_any_policy_accepts_every_device() {
        let matcher = Matcher::new(&[MessageType::StatePower], session(), TargetPolicy::Any);
        assert!(matcher.accepts(&power_reply(1234, BULB)));
        assert!(matcher.accepts(&power_reply(1234, OTHER)));
    }

    #[test]
    fn test_unexpected_type_rejected() {
        let matcher = Matcher::new(&[MessageType::StateLabel], session(), TargetPolicy::Any);
        assert_eq!(
            matcher.check(&power_reply(1234, BULB)),
            Err(Rejection::UnexpectedType(MessageType::StatePower))
        );
    }

    #[test]
    fn test_any_of_several_expected_types() {
        let matcher = Matcher::new(
            &[MessageType::StatePower, MessageType::Acknowledgement],
            session(),
            TargetPolicy::Exact(BULB),
        );
        let ack = Message::new(Payload::Acknowledgement)
            .with_source(1234)
            .with_target(BULB);
        assert!(matcher.accepts(&ack));
        assert!(matcher.accepts(&power_reply(1234, BULB)));
    }

    proptest! {
        #[test]
        fn prop_foreign_session_never_accepted(source in any::<u32>(), mac in any::<[u8; 6]>()) {
            prop_assume!(source != 1234);
            let matcher = Matcher::new(&[MessageType::StatePower], session(), TargetPolicy::Any);
            let reply = power_reply(source, HardwareAddress::new(mac));
            prop_assert_eq!(matcher.check(&reply), Err(Rejection::ForeignSession(source)));
        }
    }
}
