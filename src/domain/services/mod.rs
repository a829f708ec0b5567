mod load_balancer;
mod port_allocation;

pub use load_balancer::{LoadBalancer, RoundRobin};
pub use port_allocation::{Allocation, PortAllocator};
