/// Outcome of a cache lookup.
///
/// `Lookup` is the "not found" marker of the cache: a miss is a distinct variant, so a
/// cached `None`, `()` or any other value can never be mistaken for an absent entry.
///
/// # Examples
///
/// ```
/// use memora_core::Lookup;
///
/// let cached: Lookup<Option<i32>> = Lookup::Hit(None);
/// assert!(cached.is_hit());
/// assert_eq!(cached.into_option(), Some(None));
///
/// let missing: Lookup<Option<i32>> = Lookup::Miss;
/// assert_eq!(missing.into_option(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
}

impl<T> Lookup<T> {
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    #[inline]
    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// Converts into an `Option`, `Hit(v)` becoming `Some(v)`.
    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Miss => Lookup::Miss,
        }
    }
}

impl<T: Clone> Lookup<&T> {
    /// Maps a `Lookup<&T>` to a `Lookup<T>` by cloning the hit.
    #[inline]
    pub fn cloned(self) -> Lookup<T> {
        self.map(T::clone)
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_holding_none_is_still_a_hit() {
        let lookup: Lookup<Option<()>> = Lookup::Hit(None);
        assert!(lookup.is_hit());
        assert!(!lookup.is_miss());
    }

    #[test]
    fn test_cloned() {
        let value = String::from("cached");
        let lookup = Lookup::Hit(&value).cloned();
        assert_eq!(lookup, Lookup::Hit(String::from("cached")));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Lookup::from(Some(3)), Lookup::Hit(3));
        assert_eq!(Lookup::<i32>::from(None), Lookup::Miss);
    }
}
