//! Macros for ergonomic token declaration.

/// Declare a state-token enum with the full derive set the engine and the
/// snapshot codecs expect.
///
/// Variants are plain unit variants; attributes and visibility pass
/// through. The serde derives mean a `token_enum!` token can go straight
/// into [`MachineSnapshot`](crate::MachineSnapshot) round trips.
///
/// # Example
///
/// ```
/// use trigfsm::token_enum;
///
/// token_enum! {
///     pub enum Checkout {
///         Browsing,
///         Paying,
///         Done,
///     }
/// }
///
/// assert_ne!(Checkout::Browsing, Checkout::Done);
/// ```
#[macro_export]
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Debug,
            serde::Serialize,
            serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    token_enum! {
        enum TestToken {
            One,
            Two,
            Three,
        }
    }

    #[test]
    fn token_enum_derives_identity_traits() {
        let mut map = HashMap::new();
        map.insert(TestToken::One, "one");
        map.insert(TestToken::Two, "two");

        assert_eq!(map[&TestToken::One], "one");
        assert_eq!(TestToken::Three, TestToken::Three);
        assert_ne!(TestToken::One, TestToken::Two);
    }

    #[test]
    fn token_enum_round_trips_through_serde() {
        let json = serde_json::to_string(&TestToken::Two).unwrap();
        let back: TestToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestToken::Two);
    }

    #[test]
    fn token_enum_supports_visibility_and_attributes() {
        token_enum! {
            /// Publicly visible token set.
            pub enum PublicToken {
                A,
                B,
            }
        }

        let _token = PublicToken::A;
    }
}
