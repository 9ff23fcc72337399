//! Entity interfaces of kernels.
use dfc_ir::{Access, DesignUnit, Kernel, NodeIdx, NodeKind, PortDir};
use std::collections::HashMap;
use std::io;

/// Turn `name` into a basic VHDL identifier: letters, digits and single
/// underscores, starting with a letter and not ending with an underscore.
pub(super) fn ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        return "n".to_string();
    }
    if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert_str(0, "n_");
    }
    out
}

/// The VHDL type of a `width`-bit value.
pub(super) fn slv(width: u64) -> String {
    format!("std_logic_vector({} downto 0)", width.saturating_sub(1))
}

/// A named value of the generated architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Signal {
    pub name: String,
    pub width: u64,
}

/// One port of an entity.
#[derive(Debug, Clone)]
pub(super) struct PortDecl {
    pub name: String,
    pub dir: &'static str,
    pub width: u64,
}

/// The address and data ports of a single stream access.
#[derive(Debug, Clone)]
pub(super) struct AccessPorts {
    pub addr: String,
    pub data: String,
}

/// The port list of a kernel entity and the nodes it binds.
#[derive(Debug, Default)]
pub(super) struct Interface {
    pub ports: Vec<PortDecl>,
    /// Values available as entity inputs: scalar inputs and loaded data.
    pub inputs: HashMap<NodeIdx, Signal>,
    /// Ports of every stream access.
    pub accesses: HashMap<NodeIdx, AccessPorts>,
}

impl Interface {
    /// Kernel inputs first, then outputs. Every stream access gets an
    /// address and a data port, numbered per port and direction in program
    /// order.
    pub fn new(design: &DesignUnit, kernel: &Kernel) -> Self {
        let mut iface = Interface::default();
        for port in kernel.ports() {
            let node = design.node(port);
            let name = ident(&node.unique_name());
            match &node.kind {
                NodeKind::ScalarPort(dir) => {
                    let dir = if *dir == PortDir::In { "in" } else { "out" };
                    if dir == "in" {
                        iface.inputs.insert(
                            port,
                            Signal {
                                name: name.clone(),
                                width: node.bitwidth(),
                            },
                        );
                    }
                    iface.ports.push(PortDecl {
                        name,
                        dir,
                        width: node.bitwidth(),
                    });
                }
                NodeKind::StreamPort(sp) => {
                    let (mut loads, mut stores) = (0, 0);
                    for (idx, access) in sp.accesses() {
                        let NodeKind::StreamIndex(index) = &design.node(*idx).kind
                        else {
                            continue;
                        };
                        let counter = match access {
                            Access::Load => &mut loads,
                            Access::Store => &mut stores,
                        };
                        let prefix =
                            format!("{name}_{}{}", access.as_str(), *counter);
                        *counter += 1;
                        let width = design.node(*idx).bitwidth();
                        let ports = AccessPorts {
                            addr: format!("{prefix}_addr"),
                            data: format!("{prefix}_data"),
                        };
                        iface.ports.push(PortDecl {
                            name: ports.addr.clone(),
                            dir: "out",
                            width: index.addr_width,
                        });
                        let data_dir = match access {
                            Access::Load => {
                                iface.inputs.insert(
                                    *idx,
                                    Signal {
                                        name: ports.data.clone(),
                                        width,
                                    },
                                );
                                "in"
                            }
                            Access::Store => "out",
                        };
                        iface.ports.push(PortDecl {
                            name: ports.data.clone(),
                            dir: data_dir,
                            width,
                        });
                        iface.accesses.insert(*idx, ports);
                    }
                }
                _ => (),
            }
        }
        iface
    }

    /// Write the port clause, clock and reset first. Port names get
    /// `prefix` prepended.
    pub fn write_ports<F: io::Write>(
        &self,
        prefix: &str,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "  port (")?;
        write!(f, "    clk : in std_logic;\n    rst : in std_logic")?;
        for port in &self.ports {
            write!(
                f,
                ";\n    {prefix}{} : {} {}",
                port.name,
                port.dir,
                slv(port.width)
            )?;
        }
        writeln!(f, "\n  );")
    }
}
