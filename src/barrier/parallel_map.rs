use super::Barrier;
use crate::cancel::CancelToken;
use std::time::Duration;

impl Barrier {
    /// Applies `mapper` to every value on its own thread, under a shared
    /// deadline of `max_wait` from now.
    ///
    /// Results and errors come back in input order, as for
    /// [`wait_all`](Self::wait_all). The deadline is only observed by mappers
    /// that check the token they are given; one that never does runs to
    /// completion. The derived token is cancelled before this returns.
    ///
    /// ```
    /// use std::time::Duration;
    /// use waitall::{Barrier, Error};
    ///
    /// let (results, errors) = Barrier::default().parallel_map(
    ///     vec![1, 2, 3, 4, 5],
    ///     Duration::from_secs(1),
    ///     |_, v| Ok::<_, Error>(v * v),
    /// );
    /// assert_eq!(results, vec![1, 4, 9, 16, 25]);
    /// assert!(errors.iter().all(Option::is_none));
    /// ```
    pub fn parallel_map<V, T, E, F, I>(
        &self,
        values: I,
        max_wait: Duration,
        mapper: F,
    ) -> (Vec<T>, Vec<Option<E>>)
    where
        I: IntoIterator<Item = V>,
        V: Send,
        T: Default + Send,
        E: Send,
        F: Fn(&CancelToken, V) -> Result<T, E> + Sync,
    {
        let guard = CancelToken::with_timeout(max_wait).drop_guard();
        self.map_under(guard.token(), values, mapper)
    }

    /// Like [`parallel_map`](Self::parallel_map), with the deadline token
    /// derived from `parent`. Cancelling `parent` cancels the mappers too.
    pub fn parallel_map_with<V, T, E, F, I>(
        &self,
        parent: &CancelToken,
        values: I,
        max_wait: Duration,
        mapper: F,
    ) -> (Vec<T>, Vec<Option<E>>)
    where
        I: IntoIterator<Item = V>,
        V: Send,
        T: Default + Send,
        E: Send,
        F: Fn(&CancelToken, V) -> Result<T, E> + Sync,
    {
        let guard = parent.child_with_timeout(max_wait).drop_guard();
        self.map_under(guard.token(), values, mapper)
    }

    fn map_under<V, T, E, F, I>(
        &self,
        token: &CancelToken,
        values: I,
        mapper: F,
    ) -> (Vec<T>, Vec<Option<E>>)
    where
        I: IntoIterator<Item = V>,
        V: Send,
        T: Default + Send,
        E: Send,
        F: Fn(&CancelToken, V) -> Result<T, E> + Sync,
    {
        let mapper = &mapper;
        let waitables = values
            .into_iter()
            .map(move |value| move |token: &CancelToken| mapper(token, value));

        self.wait_all(Some(token), waitables)
    }
}
