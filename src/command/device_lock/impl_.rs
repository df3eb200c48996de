use super::types::PinStatusCode;
use serde::{de, Deserialize, Deserializer};

impl<'de> Deserialize<'de> for PinStatusCode {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = PinStatusCode;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a +CPIN status code")
            }

            fn visit_bytes<E>(self, value: &[u8]) -> core::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                let value = value.trim_ascii();
                PinStatusCode::ALL
                    .into_iter()
                    .find(|code| code.as_str().as_bytes() == value)
                    .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Bytes(value), &self))
            }

            fn visit_str<E>(self, value: &str) -> core::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_bytes(value.as_bytes())
            }
        }

        // Codes like `PH-NET PIN` are not valid unquoted strings to serde_at
        deserializer.deserialize_bytes(Visitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::device_lock::responses::PinStatus;
    use atat::serde_at::de::from_str;

    #[test]
    fn deserialize_pin_status() {
        assert_eq!(
            from_str("+CPIN: READY"),
            Ok(PinStatus {
                code: PinStatusCode::Ready
            })
        );

        assert_eq!(
            from_str("+CPIN: SIM PIN"),
            Ok(PinStatus {
                code: PinStatusCode::SimPin
            })
        );

        assert_eq!(
            from_str("+CPIN: PH-NETSUB PIN"),
            Ok(PinStatus {
                code: PinStatusCode::PhNetSubPin
            })
        );

        assert!(from_str::<PinStatus>("+CPIN: NOT INSERTED").is_err());
    }
}
