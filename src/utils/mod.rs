#[inline(always)]
pub const fn roundup2(x: usize, a: usize) -> usize {
    (x + (a - 1)) & !(a - 1)
}

#[repr(transparent)]
pub struct IndentWriter(pub usize);
impl core::fmt::Display for IndentWriter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for _ in 0..self.0 {
            f.write_str("  ")?;
        }

        Ok(())
    }
}

#[repr(transparent)]
pub struct SwizzleElementWriter<'s>(pub &'s [usize]);
impl core::fmt::Display for SwizzleElementWriter<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use core::fmt::Write;

        for x in self.0 {
            f.write_char(['x', 'y', 'z', 'w'][*x])?;
        }

        Ok(())
    }
}

#[repr(transparent)]
pub struct CommaSeparatedWriter<'s, T: 's>(pub &'s [T]);
impl<'s, T: 's> core::fmt::Display for CommaSeparatedWriter<'s, T>
where
    T: core::fmt::Display,
{
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        for x in self.0 {
            if wrote {
                f.write_str(", ")?;
            }
            <T as core::fmt::Display>::fmt(x, f)?;
            wrote = true;
        }

        Ok(())
    }
}
