use std::hash::Hash;
use std::marker::PhantomData;

/// Generation-indexed reference to an entry in a [`Pool`].
///
/// Handles are plain values: copying one never duplicates the entry it
/// points at, and a handle outliving its entry simply stops resolving.
#[derive(Debug)]
pub struct Handle<T> {
    pub slot: u16,
    pub generation: u16,
    phantom: PhantomData<T>,
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Copy for Handle<T> {}
impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self {
            slot: Default::default(),
            generation: Default::default(),
            phantom: Default::default(),
        }
    }
}

/// Slot arena handing out [`Handle`]s.
///
/// Releasing a slot bumps its generation, so handles held past a release
/// resolve to `None` instead of whatever moves in next.
pub struct Pool<T> {
    items: Vec<Option<T>>,
    empty: Vec<usize>,
    generation: Vec<u16>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        const INITIAL_SIZE: usize = 1024;
        Self::new(INITIAL_SIZE)
    }
}

impl<T> Pool<T> {
    pub fn new(initial_size: usize) -> Self {
        let mut p = Pool {
            items: Vec::with_capacity(initial_size),
            empty: Vec::with_capacity(initial_size),
            generation: vec![0; initial_size],
        };

        p.empty = (0..initial_size).collect();
        p.items.resize_with(initial_size, || None);
        return p;
    }

    pub fn insert(&mut self, item: T) -> Option<Handle<T>> {
        let empty_slot = self.empty.pop()?;

        self.items[empty_slot] = Some(item);

        return Some(Handle {
            slot: empty_slot as u16,
            generation: self.generation[empty_slot],
            phantom: PhantomData,
        });
    }

    pub fn release(&mut self, item: Handle<T>) -> Option<T> {
        let slot = item.slot as usize;
        if self.generation[slot] != item.generation {
            return None;
        }

        let released = self.items[slot].take();
        if released.is_some() {
            self.generation[slot] = self.generation[slot].wrapping_add(1);
            self.empty.push(slot);
        }
        released
    }

    pub fn get_ref(&self, item: Handle<T>) -> Option<&T> {
        let slot = item.slot as usize;
        if self.generation[slot] == item.generation {
            self.items[slot].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut_ref(&mut self, item: Handle<T>) -> Option<&mut T> {
        let slot = item.slot as usize;
        if self.generation[slot] == item.generation {
            self.items[slot].as_mut()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut pool = Pool::new(4);
        let h = pool.insert(17u32).unwrap();
        assert_eq!(pool.get_ref(h), Some(&17));
    }

    #[test]
    fn release_invalidates_old_handles() {
        let mut pool = Pool::new(4);
        let h = pool.insert(1u32).unwrap();
        assert_eq!(pool.release(h), Some(1));
        assert_eq!(pool.get_ref(h), None);

        // Slot gets reused, but under a new generation.
        let h2 = pool.insert(2u32).unwrap();
        assert_eq!(pool.get_ref(h), None);
        assert_eq!(pool.get_ref(h2), Some(&2));
    }

    #[test]
    fn double_release_is_a_no_op() {
        let mut pool = Pool::new(4);
        let h = pool.insert(5u32).unwrap();
        assert_eq!(pool.release(h), Some(5));
        assert_eq!(pool.release(h), None);
    }

    #[test]
    fn exhausted_pool_refuses_inserts() {
        let mut pool = Pool::new(1);
        let _h = pool.insert(0u32).unwrap();
        assert!(pool.insert(1u32).is_none());
    }
}
