use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value type stored as a JSON document in its own table.
///
/// `TABLE_NAME` is the bare type name used for the table. A polymorphic
/// entity (typically an enum tagged with `#[serde(tag = "$type")]`) lists the
/// closed set of shape names it can hold in `SHAPES` and reports the shape of
/// each value from [`Entity::shape`]; typed documents carry that name as
/// their discriminator.
///
/// ```
/// use colrepo_types::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(tag = "$type")]
/// enum Shape {
///     Circle { radius: f64 },
///     Square { side: f64 },
/// }
///
/// impl Entity for Shape {
///     const TABLE_NAME: &'static str = "Shape";
///     const SHAPES: &'static [&'static str] = &["Circle", "Square"];
///
///     fn shape(&self) -> &'static str {
///         match self {
///             Shape::Circle { .. } => "Circle",
///             Shape::Square { .. } => "Square",
///         }
///     }
/// }
///
/// assert!(Shape::accepts_shape("Square"));
/// assert!(!Shape::accepts_shape("Shape"));
/// ```
pub trait Entity: Serialize + DeserializeOwned {
    /// Bare name of the table holding this type.
    const TABLE_NAME: &'static str;

    /// Registered shape names. Empty for a monomorphic type, whose only
    /// shape is `TABLE_NAME`.
    const SHAPES: &'static [&'static str] = &[];

    /// Shape name of the concrete value.
    fn shape(&self) -> &'static str {
        Self::TABLE_NAME
    }

    /// Whether this type holds more than one registered shape.
    fn is_polymorphic() -> bool {
        !Self::SHAPES.is_empty()
    }

    /// Whether a document tagged `tag` may be decoded as this type.
    fn accepts_shape(tag: &str) -> bool {
        if Self::is_polymorphic() {
            Self::SHAPES.contains(&tag)
        } else {
            tag == Self::TABLE_NAME
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Plain {
        n: u32,
    }

    impl Entity for Plain {
        const TABLE_NAME: &'static str = "Plain";
    }

    #[derive(Serialize, Deserialize)]
    #[serde(tag = "$type")]
    enum Animal {
        Dog { name: String },
        Cat { lives: u8 },
    }

    impl Entity for Animal {
        const TABLE_NAME: &'static str = "Animal";
        const SHAPES: &'static [&'static str] = &["Dog", "Cat"];

        fn shape(&self) -> &'static str {
            match self {
                Animal::Dog { .. } => "Dog",
                Animal::Cat { .. } => "Cat",
            }
        }
    }

    #[test]
    fn monomorphic_accepts_only_own_name() {
        assert!(!Plain::is_polymorphic());
        assert!(Plain::accepts_shape("Plain"));
        assert!(!Plain::accepts_shape("Other"));
        assert_eq!(Plain { n: 1 }.shape(), "Plain");
    }

    #[test]
    fn polymorphic_accepts_registered_shapes() {
        assert!(Animal::is_polymorphic());
        assert!(Animal::accepts_shape("Dog"));
        assert!(Animal::accepts_shape("Cat"));
        assert!(!Animal::accepts_shape("Animal"));
        assert_eq!(Animal::Cat { lives: 9 }.shape(), "Cat");
        assert_eq!(Animal::Dog { name: "rex".into() }.shape(), "Dog");
    }
}
