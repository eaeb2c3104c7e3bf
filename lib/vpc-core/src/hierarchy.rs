//! Hierarchical request wrapper
//!
//! Org and project are sent as references so the backend leaves them
//! untouched; the VPC and its children travel in the same request so they
//! are accepted or rejected together.

use vpc_api::backend::hierarchy::{HierarchyChild, VpcNode};
use vpc_api::backend::{LbService, OrgRoot, Vpc, VpcAttachment};

/// org -> project -> VPC -> {LB service, attachment}
pub fn wrap_vpc_hierarchy(
    org: &str,
    project: &str,
    vpc: Vpc,
    lb_service: Option<LbService>,
    attachment: Option<VpcAttachment>,
) -> OrgRoot {
    let mut children = Vec::new();
    if let Some(lb_service) = lb_service {
        children.push(HierarchyChild::ChildLbService {
            marked_for_delete: lb_service.marked_for_delete,
            lb_service,
        });
    }
    if let Some(attachment) = attachment {
        children.push(HierarchyChild::ChildVpcAttachment {
            marked_for_delete: attachment.marked_for_delete,
            attachment,
        });
    }

    let vpc_child = HierarchyChild::ChildVpc {
        marked_for_delete: vpc.marked_for_delete,
        vpc: VpcNode { vpc, children },
    };
    wrap_in_project(org, project, vpc_child)
}

fn wrap_in_project(org: &str, project: &str, child: HierarchyChild) -> OrgRoot {
    let project_ref = HierarchyChild::ChildResourceReference {
        id: project.to_string(),
        target_type: "Project".to_string(),
        children: vec![child],
    };
    let org_ref = HierarchyChild::ChildResourceReference {
        id: org.to_string(),
        target_type: "Org".to_string(),
        children: vec![project_ref],
    };
    OrgRoot::new(vec![org_ref])
}
