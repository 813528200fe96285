use std::borrow::Cow;

use pulldown_cmark::Event;

use crate::error::Result;

/// A stage of the markdown compiler.
///
/// A plugin may rewrite the source text before parsing, observe or rewrite
/// the event stream, and finish its own bookkeeping once the stream has been
/// consumed. Every method defaults to doing nothing.
pub trait Plugin {
    #[inline(always)]
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(input))
    }

    #[inline(always)]
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        events
    }

    /// Called after the stream returned by [`Plugin::remap()`] is exhausted.
    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
