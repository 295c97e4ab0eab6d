//! Reuse pools for labels and animations

use crate::render::Animator;

/// Bounded stack of idle objects waiting to be reused
#[derive(Debug, Clone)]
pub struct Pool<T> {
    idle: Vec<T>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Creates a pool that keeps at most `capacity` idle objects
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Vec::new(),
            capacity,
        }
    }

    /// Takes an idle object, transferring ownership to the caller
    pub fn take(&mut self) -> Option<T> {
        self.idle.pop()
    }

    /// Returns an object to the pool. Hands it back if the pool is full.
    pub fn release(&mut self, item: T) -> Option<T> {
        if self.idle.len() >= self.capacity {
            return Some(item);
        }
        self.idle.push(item);
        None
    }

    /// Number of idle objects
    pub fn len(&self) -> usize {
        self.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    /// Removes every idle object
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.idle.drain(..)
    }
}

/// Label and animation pools of one session.
///
/// Handles are created through the animator only when no pooled one can be
/// reused, and handed back to it for destruction when the pool is full.
#[derive(Debug)]
pub struct ResourcePool<L, A> {
    labels: Pool<L>,
    animations: Pool<A>,
    animation_retention: usize,
    labels_created: usize,
    animations_created: usize,
}

impl<L, A> ResourcePool<L, A> {
    /// Creates empty pools.
    ///
    /// Pooled animations are only reused while more than
    /// `animation_retention` of them are idle.
    pub fn new(capacity: usize, animation_retention: usize) -> Self {
        Self {
            labels: Pool::new(capacity),
            animations: Pool::new(capacity),
            animation_retention,
            labels_created: 0,
            animations_created: 0,
        }
    }

    /// Gets a label showing `text`, reusing an idle one if possible
    pub fn acquire_label<R>(&mut self, animator: &mut R, text: &str) -> L
    where
        R: Animator<Label = L, Animation = A>,
    {
        match self.labels.take() {
            Some(mut label) => {
                animator.set_text(&mut label, text);
                label
            }
            None => {
                self.labels_created += 1;
                animator.create_label(text)
            }
        }
    }

    /// Gets an idle animation. Reused ones are stopped before they are
    /// returned.
    pub fn acquire_animation<R>(&mut self, animator: &mut R) -> A
    where
        R: Animator<Label = L, Animation = A>,
    {
        if self.animations.len() > self.animation_retention {
            if let Some(mut animation) = self.animations.take() {
                animator.stop(&mut animation);
                return animation;
            }
        }
        self.animations_created += 1;
        animator.create_animation()
    }

    /// Returns a label and its animation to the pools
    pub fn release<R>(&mut self, animator: &mut R, label: L, animation: A)
    where
        R: Animator<Label = L, Animation = A>,
    {
        if let Some(label) = self.labels.release(label) {
            animator.destroy_label(label);
        }
        if let Some(animation) = self.animations.release(animation) {
            animator.destroy_animation(animation);
        }
    }

    /// Destroys every idle handle
    pub fn purge<R>(&mut self, animator: &mut R)
    where
        R: Animator<Label = L, Animation = A>,
    {
        for label in self.labels.drain() {
            animator.destroy_label(label);
        }
        for animation in self.animations.drain() {
            animator.destroy_animation(animation);
        }
    }

    pub fn idle_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn idle_animations(&self) -> usize {
        self.animations.len()
    }

    /// Labels created over the pool's lifetime
    pub fn labels_created(&self) -> usize {
        self.labels_created
    }

    /// Animations created over the pool's lifetime
    pub fn animations_created(&self) -> usize {
        self.animations_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Completion, Flight, TextStyle};

    /// Animator whose handles are plain values, counting calls
    #[derive(Default)]
    struct Counting {
        next_animation: u32,
        stops: Vec<u32>,
        destroyed_labels: Vec<String>,
        destroyed_animations: Vec<u32>,
    }

    impl Animator for Counting {
        type Label = String;
        type Animation = u32;

        fn create_label(&mut self, text: &str) -> String {
            text.to_string()
        }

        fn set_text(&mut self, label: &mut String, text: &str) {
            *label = text.to_string();
        }

        fn set_style(&mut self, _label: &mut String, _style: &TextStyle) {}

        fn show(&mut self, _label: &mut String) {}

        fn hide(&mut self, _label: &mut String) {}

        fn create_animation(&mut self) -> u32 {
            self.next_animation += 1;
            self.next_animation
        }

        fn start_animation(&mut self, _: &mut u32, _: &String, _: &Flight, _: Completion) {}

        fn stop(&mut self, animation: &mut u32) {
            self.stops.push(*animation);
        }

        fn destroy_label(&mut self, label: String) {
            self.destroyed_labels.push(label);
        }

        fn destroy_animation(&mut self, animation: u32) {
            self.destroyed_animations.push(animation);
        }
    }

    #[test]
    fn test_pool_bounds_idle_objects() {
        let mut pool = Pool::new(2);
        assert_eq!(pool.release(1), None);
        assert_eq!(pool.release(2), None);
        assert_eq!(pool.release(3), Some(3));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.take(), Some(2));
        assert_eq!(pool.drain().collect::<Vec<_>>(), vec![1]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_labels_are_reused_and_rebound() {
        let mut animator = Counting::default();
        let mut pool = ResourcePool::new(8, 3);

        let first = pool.acquire_label(&mut animator, "first");
        let animation = pool.acquire_animation(&mut animator);
        pool.release(&mut animator, first, animation);

        let second = pool.acquire_label(&mut animator, "second");
        assert_eq!(second, "second");
        assert_eq!(pool.labels_created(), 1);
        assert_eq!(pool.idle_labels(), 0);
    }

    #[test]
    fn test_animations_reused_only_above_retention() {
        let mut animator = Counting::default();
        let mut pool = ResourcePool::new(8, 3);

        let handles: Vec<(String, u32)> = (0..4)
            .map(|i| {
                let label = pool.acquire_label(&mut animator, &i.to_string());
                (label, pool.acquire_animation(&mut animator))
            })
            .collect();
        for (label, animation) in handles {
            pool.release(&mut animator, label, animation);
        }
        assert_eq!(pool.idle_animations(), 4);

        // 4 idle > 3 retained: reuse, stopping it first
        let reused = pool.acquire_animation(&mut animator);
        assert_eq!(reused, 4);
        assert_eq!(animator.stops, vec![4]);
        assert_eq!(pool.animations_created(), 4);

        // 3 idle is not above retention: allocate fresh
        let fresh = pool.acquire_animation(&mut animator);
        assert_eq!(fresh, 5);
        assert_eq!(pool.idle_animations(), 3);
    }

    #[test]
    fn test_overflow_and_purge_destroy_handles() {
        let mut animator = Counting::default();
        let mut pool = ResourcePool::new(1, 0);

        let a = (pool.acquire_label(&mut animator, "a"), pool.acquire_animation(&mut animator));
        let b = (pool.acquire_label(&mut animator, "b"), pool.acquire_animation(&mut animator));
        pool.release(&mut animator, a.0, a.1);
        pool.release(&mut animator, b.0, b.1);
        assert_eq!(animator.destroyed_labels, vec!["b".to_string()]);
        assert_eq!(animator.destroyed_animations, vec![2]);

        pool.purge(&mut animator);
        assert_eq!(pool.idle_labels(), 0);
        assert_eq!(pool.idle_animations(), 0);
        assert_eq!(animator.destroyed_labels.len(), 2);
    }
}
