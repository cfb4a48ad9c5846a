/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::HallDirection;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// A hall button was pressed somewhere.
    NewOrder,
    /// The sender has the hall call and acknowledges the announcement.
    OrderAccepted,
    /// The sender served the hall call; everybody retracts it.
    Completed,
}

/// The datagram exchanged between cars. `origin` is the sender's elevator id, used
/// to drop the echo of our own broadcasts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderMessage {
    pub origin: u8,
    pub kind: MessageKind,
    pub floor: u8,
    pub direction: HallDirection,
}

impl OrderMessage {
    pub fn new(origin: u8, kind: MessageKind, floor: u8, direction: HallDirection) -> OrderMessage {
        OrderMessage {
            origin,
            kind,
            floor,
            direction,
        }
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod message_tests {
    use super::{MessageKind, OrderMessage};
    use crate::shared::HallDirection;

    #[test]
    fn test_wire_format() {
        // Arrange
        let message = OrderMessage::new(3, MessageKind::OrderAccepted, 2, HallDirection::Down);

        // Act
        let json = serde_json::to_string(&message).unwrap();

        // Assert
        assert_eq!(
            json,
            r#"{"origin":3,"kind":"orderAccepted","floor":2,"direction":"down"}"#
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(serde_json::from_str::<OrderMessage>(r#"{"origin":1,"kind":"reboot"}"#).is_err());
        assert!(serde_json::from_str::<OrderMessage>(
            r#"{"origin":1,"kind":"newOrder","floor":0,"direction":"stop"}"#
        )
        .is_err());
    }
}
