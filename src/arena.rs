/*!
 * Bump allocation of plain data in geometrically growing chunks.
 *
 * An [Arena] hands out [Slot]s (single values) and [Span]s (contiguous arrays) from a list
 * of fixed capacity chunks. Nothing is ever freed individually, instead the whole arena can
 * be rolled back to an [ArenaMark] captured earlier, discarding everything allocated after
 * it in one step. Chunks are never reallocated once created, and chunks emptied by a rollback
 * are kept around and reused by later allocations, so a rollback followed by the same
 * allocations again does not touch the system allocator.
 *
 * Stored types must be `Copy`. This guarantees they own no resources that would need a
 * destructor to run when a rollback discards them.
 *
 * ```
 * use easy_rev::arena::{Arena, ArenaConfig};
 * let mut arena = Arena::new(ArenaConfig { initial_chunk_capacity: 2, growth_factor: 2 });
 * let a = arena.alloc(1.0);
 * let mark = arena.checkpoint();
 * let b = arena.alloc_slice(&[2.0, 3.0, 4.0]);
 * assert_eq!(arena.slice(b), &[2.0, 3.0, 4.0]);
 * arena.rollback(mark);
 * assert_eq!(arena.len(), 1);
 * assert_eq!(*arena.get(a), 1.0);
 * ```
 */

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/**
 * Sizing of the chunks an [Arena] allocates from.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArenaConfig {
    /**
     * Number of values the first chunk can hold.
     */
    pub initial_chunk_capacity: usize,
    /**
     * Each new chunk holds this many times the values of the previous chunk.
     */
    pub growth_factor: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            initial_chunk_capacity: 1024,
            growth_factor: 2,
        }
    }
}

/**
 * Location of a single value allocated from an [Arena].
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    chunk: usize,
    offset: usize,
}

/**
 * Location of a contiguous array of values allocated from an [Arena].
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    chunk: usize,
    offset: usize,
    len: usize,
}

impl Span {
    /**
     * The number of values in the array.
     */
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/**
 * The allocation state of an [Arena] at some point in time, which the arena can later
 * be rolled back to.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArenaMark {
    chunk: usize,
    len: usize,
    allocated: usize,
}

/**
 * A bump allocator for `Copy` values.
 *
 * Allocation is amortized O(1). An Arena is not synchronised in any way, each owner
 * (such as a [Context](crate::differentiation::Context)) keeps its own.
 */
#[derive(Debug)]
pub struct Arena<T: Copy> {
    chunks: Vec<Vec<T>>,
    // the chunk allocations are currently bumped from, chunks after it are empty
    current: usize,
    allocated: usize,
    config: ArenaConfig,
}

impl<T: Copy> Arena<T> {
    /**
     * Creates an arena with a single empty chunk sized by the config.
     */
    pub fn new(config: ArenaConfig) -> Arena<T> {
        let config = ArenaConfig {
            initial_chunk_capacity: config.initial_chunk_capacity.max(1),
            growth_factor: config.growth_factor.max(1),
        };
        Arena {
            chunks: vec![Vec::with_capacity(config.initial_chunk_capacity)],
            current: 0,
            allocated: 0,
            config,
        }
    }

    /**
     * The configuration this arena sizes its chunks with.
     */
    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    /**
     * Moves the bump pointer to the first chunk with room for `needed` more values,
     * creating a new chunk if none of the existing ones have room.
     */
    fn chunk_with_room(&mut self, needed: usize) -> usize {
        loop {
            let chunk = &self.chunks[self.current];
            if chunk.capacity() - chunk.len() >= needed {
                return self.current;
            }
            self.current += 1;
            if self.current == self.chunks.len() {
                let previous = self.chunks[self.current - 1].capacity();
                let capacity = previous
                    .saturating_mul(self.config.growth_factor)
                    .max(needed);
                debug!(
                    "arena growing to {} chunks, new chunk holds {} values",
                    self.chunks.len() + 1,
                    capacity
                );
                self.chunks.push(Vec::with_capacity(capacity));
            }
        }
    }

    /**
     * Allocates a single value.
     */
    #[inline]
    pub fn alloc(&mut self, value: T) -> Slot {
        let chunk = self.chunk_with_room(1);
        let offset = self.chunks[chunk].len();
        self.chunks[chunk].push(value);
        self.allocated += 1;
        Slot { chunk, offset }
    }

    /**
     * Allocates a copy of the values as one contiguous array.
     */
    pub fn alloc_slice(&mut self, values: &[T]) -> Span {
        let chunk = self.chunk_with_room(values.len());
        let offset = self.chunks[chunk].len();
        self.chunks[chunk].extend_from_slice(values);
        self.allocated += values.len();
        Span {
            chunk,
            offset,
            len: values.len(),
        }
    }

    /**
     * Allocates a contiguous array of `count` values, each initialised to `value`.
     */
    pub fn alloc_array(&mut self, count: usize, value: T) -> Span {
        let chunk = self.chunk_with_room(count);
        let offset = self.chunks[chunk].len();
        let new_len = offset + count;
        self.chunks[chunk].resize(new_len, value);
        self.allocated += count;
        Span {
            chunk,
            offset,
            len: count,
        }
    }

    /**
     * Returns the value at a slot.
     *
     * # Panics
     *
     * If the slot was discarded by a rollback and nothing has been allocated into its
     * position since.
     */
    #[inline]
    #[track_caller]
    pub fn get(&self, slot: Slot) -> &T {
        &self.chunks[slot.chunk][slot.offset]
    }

    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        &mut self.chunks[slot.chunk][slot.offset]
    }

    #[inline]
    #[track_caller]
    pub fn slice(&self, span: Span) -> &[T] {
        &self.chunks[span.chunk][span.offset..span.offset + span.len]
    }

    #[inline]
    #[track_caller]
    pub fn slice_mut(&mut self, span: Span) -> &mut [T] {
        &mut self.chunks[span.chunk][span.offset..span.offset + span.len]
    }

    /**
     * Captures the current allocation state.
     */
    pub fn checkpoint(&self) -> ArenaMark {
        ArenaMark {
            chunk: self.current,
            len: self.chunks[self.current].len(),
            allocated: self.allocated,
        }
    }

    /**
     * Discards every value allocated after the mark was captured. No destructors run,
     * the chunk memory is kept for reuse.
     *
     * # Panics
     *
     * If the mark describes more allocations than the arena currently holds, ie it was
     * captured after a point this arena has already been rolled back past.
     */
    #[track_caller]
    pub fn rollback(&mut self, mark: ArenaMark) {
        assert!(
            mark.allocated <= self.allocated && mark.chunk <= self.current,
            "Arena mark is ahead of the arena, it was captured after a rolled back allocation"
        );
        self.chunks[mark.chunk].truncate(mark.len);
        for chunk in &mut self.chunks[mark.chunk + 1..=self.current] {
            chunk.clear();
        }
        self.current = mark.chunk;
        self.allocated = mark.allocated;
    }

    /**
     * Discards every value in the arena, keeping the chunks for reuse.
     */
    pub fn reset(&mut self) {
        self.rollback(ArenaMark::default());
    }

    /**
     * The number of values currently allocated.
     */
    pub fn len(&self) -> usize {
        self.allocated
    }

    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /**
     * The number of chunks created so far, including empty ones kept for reuse.
     */
    pub fn chunks(&self) -> usize {
        self.chunks.len()
    }

    /**
     * The total number of values the existing chunks can hold.
     */
    pub fn capacity(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.capacity()).sum()
    }
}

impl<T: Copy> Default for Arena<T> {
    fn default() -> Self {
        Arena::new(ArenaConfig::default())
    }
}
