use dfc::driver;
use dfc_utils::DfcResult;

fn main() -> DfcResult<()> {
    driver::run_compiler()
}
