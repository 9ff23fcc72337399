use dfc_utils::{DfcResult, OutputDir};
use std::io::{self, Write as _};

const MAKEFILE: &str = "\
DOT ?= dot
INKSCAPE ?= inkscape

SOURCES := $(wildcard *.dot)

all: png

png: $(SOURCES:.dot=.png)
svg: $(SOURCES:.dot=.svg)
pdf: $(SOURCES:.dot=.pdf)

%.png: %.dot
\t$(DOT) -Tpng $< -o $@

%.svg: %.dot
\t$(DOT) -Tsvg $< -o $@

%.pdf: %.svg
\t$(INKSCAPE) $< --export-filename=$@

clean:
\trm -f *.png *.svg *.pdf

.PHONY: all png svg pdf clean
";

/// Write a Makefile rendering every `.dot` file of its directory.
pub fn write_makefile(out: &OutputDir) -> DfcResult<()> {
    let mut f = out.create("Makefile")?;
    write_rules(&mut f)?;
    f.flush()?;
    Ok(())
}

fn write_rules<F: io::Write>(f: &mut F) -> io::Result<()> {
    f.write_all(MAKEFILE.as_bytes())
}
