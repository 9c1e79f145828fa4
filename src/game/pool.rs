//! Bounded enemy pool with generational handles.
//!
//! Instances are created up front (`initial_size`), grown lazily up to
//! `max_size`, and never destroyed. Releasing a slot bumps its generation so
//! every outstanding handle to it reads as gone.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::enemy::Enemy;

/// Stable reference to a pooled enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyHandle {
    index: u32,
    generation: u32,
}

impl EnemyHandle {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot {
    enemy: Enemy,
    generation: u32,
}

/// Pool of enemy instances
#[derive(Debug)]
pub struct EnemyPool {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    max_size: usize,
    active_count: usize,
}

impl EnemyPool {
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        let initial_size = initial_size.min(max_size);
        let mut pool = Self {
            slots: Vec::with_capacity(max_size),
            free: VecDeque::with_capacity(max_size),
            max_size,
            active_count: 0,
        };
        for _ in 0..initial_size {
            let index = pool.slots.len() as u32;
            pool.slots.push(Slot {
                enemy: Enemy::new(),
                generation: 0,
            });
            pool.free.push_back(index);
        }
        pool
    }

    /// Take an instance out of the pool. `None` when every slot up to
    /// `max_size` is already handed out.
    pub fn acquire(&mut self) -> Option<EnemyHandle> {
        let index = match self.free.pop_front() {
            Some(index) => index,
            None if self.slots.len() < self.max_size => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    enemy: Enemy::new(),
                    generation: 0,
                });
                tracing::debug!("Pool grew to {} instances", self.slots.len());
                index
            }
            None => {
                tracing::warn!("Enemy pool exhausted ({} active)", self.active_count);
                return None;
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.enemy.active = true;
        self.active_count += 1;
        Some(EnemyHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Return an instance to the pool and reset its combat state.
    /// Stale or already released handles are refused.
    pub fn release(&mut self, handle: EnemyHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            tracing::error!("Release of unknown pool slot {}", handle.index);
            return false;
        };
        if slot.generation != handle.generation || !slot.enemy.active {
            tracing::error!(
                "Refused double release of pool slot {} (gen {})",
                handle.index,
                handle.generation
            );
            return false;
        }

        slot.enemy.active = false;
        slot.enemy.reset_state();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(handle.index);
        self.active_count -= 1;
        true
    }

    /// Handle refers to a currently handed-out instance
    #[inline]
    pub fn contains(&self, handle: EnemyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: EnemyHandle) -> Option<&Enemy> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.enemy.active)
            .map(|s| &s.enemy)
    }

    pub fn get_mut(&mut self, handle: EnemyHandle) -> Option<&mut Enemy> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.enemy.active)
            .map(|s| &mut s.enemy)
    }

    /// Alive (active and not dead) enemy behind `handle`
    pub fn get_alive(&self, handle: EnemyHandle) -> Option<&Enemy> {
        self.get(handle).filter(|e| e.is_alive())
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (EnemyHandle, &Enemy)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.enemy.active.then(|| {
                (
                    EnemyHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &s.enemy,
                )
            })
        })
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (EnemyHandle, &mut Enemy)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            if !s.enemy.active {
                return None;
            }
            let handle = EnemyHandle {
                index: i as u32,
                generation: s.generation,
            };
            Some((handle, &mut s.enemy))
        })
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Instances created so far
    #[inline]
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
