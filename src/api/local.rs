use crate::api::{AllocationApi, AllocationQuery, Page, PageQuery};
use crate::calc::{derive_month_list, monthly_list, MonthKey};
use crate::data::{
    Allocation, AllocationData, AllocationType, CreateAllocationRequest, DirectoryData, Employee,
    Manager, Persistable, Project, Searchable, UpdateAllocationRequest,
};
use crate::error::ApiError;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// File-backed backend. Reads directory.yaml and allocations.json from the
/// data directory and writes allocations.json back after every change.
pub struct LocalApi {
    dir: Option<PathBuf>,
    directory: DirectoryData,
    data: AllocationData,
}

impl LocalApi {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(LocalApi {
            dir: Some(dir.to_path_buf()),
            directory: DirectoryData::load_from(dir)?,
            data: AllocationData::load_from(dir)?,
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(directory: DirectoryData, data: AllocationData) -> Self {
        LocalApi {
            dir: None,
            directory,
            data,
        }
    }

    pub fn directory(&self) -> &DirectoryData {
        &self.directory
    }

    fn persist(&self) -> Result<(), ApiError> {
        if let Some(dir) = &self.dir {
            self.data.save_to(dir)?;
        }
        Ok(())
    }

    fn check_references(&self, record: &Allocation) -> Result<(), ApiError> {
        if self.directory.employee(record.employee_id).is_none() {
            return Err(ApiError::Rejected(format!(
                "unknown employee {}",
                record.employee_id
            )));
        }
        match (record.allocation_type.requires_project(), record.project_id) {
            (true, None) => Err(ApiError::Rejected(
                "project allocations need a project".to_string(),
            )),
            (true, Some(id)) if self.directory.project(id).is_none() => {
                Err(ApiError::Rejected(format!("unknown project {id}")))
            }
            (false, Some(_)) => Err(ApiError::Rejected(format!(
                "{} allocations cannot reference a project",
                record.allocation_type.label()
            ))),
            _ => Ok(()),
        }
    }

    /// Rejects a record that would push the employee above 100% in any month.
    fn check_capacity(&self, record: &Allocation, except: Option<u64>) -> Result<(), ApiError> {
        for (key, value) in record.percentage_map() {
            let Some(value) = value else { continue };
            let total = self.data.employee_total(record.employee_id, key, except) + u32::from(value);
            if total > 100 {
                let who = self
                    .directory
                    .employee(record.employee_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| format!("employee {}", record.employee_id));
                return Err(ApiError::Rejected(format!(
                    "{who} would be allocated {total}% in {}",
                    key.label()
                )));
            }
        }
        Ok(())
    }

    fn vet(&self, record: Allocation, except: Option<u64>) -> Result<Allocation, ApiError> {
        validate_record(&record)?;
        self.check_references(&record)?;
        self.check_capacity(&record, except)?;
        Ok(record)
    }
}

fn search<T: Searchable + Clone>(items: &[T], query: &PageQuery) -> Page<T> {
    let hits: Vec<T> = items
        .iter()
        .filter(|item| item.matches(query.needle()))
        .cloned()
        .collect();
    Page::paginate(hits, query.page, query.size)
}

/// Field-level checks the backend applies to every stored record.
fn validate_record(record: &Allocation) -> Result<(), ApiError> {
    let months = derive_month_list(&record.range())
        .map_err(|err| ApiError::Rejected(err.to_string()))?;
    let in_range = |pct: u8| (1..=100).contains(&pct);

    if !record.is_per_month() {
        return match record.current_month_allocation {
            Some(pct) if in_range(pct) => Ok(()),
            Some(pct) => Err(ApiError::Rejected(format!("percentage {pct} out of range"))),
            None => Err(ApiError::Rejected("allocation has no percentage".to_string())),
        };
    }

    for m in &record.monthly_allocations {
        let key = m
            .key()
            .ok_or_else(|| ApiError::Rejected(format!("invalid month {}", m.month)))?;
        if !months.iter().any(|entry| entry.key == key) {
            return Err(ApiError::Rejected(format!(
                "{} is outside the allocation range",
                key.label()
            )));
        }
        if !in_range(m.percentage) {
            return Err(ApiError::Rejected(format!(
                "percentage {} for {} out of range",
                m.percentage,
                key.label()
            )));
        }
    }
    let covered: Vec<MonthKey> = record
        .monthly_allocations
        .iter()
        .filter_map(|m| m.key())
        .collect();
    if let Some(gap) = months.iter().find(|entry| !covered.contains(&entry.key)) {
        return Err(ApiError::Rejected(format!(
            "missing percentage for {}",
            gap.label
        )));
    }
    Ok(())
}

/// Applies an update on top of the stored record. A month list is a diff:
/// untouched months keep their stored value.
fn apply_update(existing: &Allocation, request: &UpdateAllocationRequest) -> Allocation {
    let mut next = existing.clone();
    next.employee_id = request.employee_id;
    next.project_id = request.project_id;
    next.start_date = request.start_date;
    next.end_date = request.end_date;
    next.allocation_type = request.allocation_type;

    let months = derive_month_list(&next.range()).unwrap_or_default();
    match (request.current_month_allocation, &request.monthly_allocations) {
        (Some(pct), _) => {
            next.current_month_allocation = Some(pct);
            next.monthly_allocations.clear();
        }
        (None, Some(changed)) => {
            let mut map = existing.percentage_map();
            for m in changed {
                if let Some(key) = m.key() {
                    map.insert(key, Some(m.percentage));
                }
            }
            next.current_month_allocation = None;
            next.monthly_allocations = monthly_list(&map, &months);
        }
        (None, None) if existing.is_per_month() => {
            next.monthly_allocations = monthly_list(&existing.percentage_map(), &months);
        }
        (None, None) => {}
    }
    next
}

impl AllocationApi for LocalApi {
    fn employees(&self, query: &PageQuery) -> Result<Page<Employee>, ApiError> {
        tracing::debug!(search = query.needle(), page = query.page, "fetch employees");
        Ok(search(&self.directory.employees, query))
    }

    fn projects(&self, query: &PageQuery) -> Result<Page<Project>, ApiError> {
        tracing::debug!(search = query.needle(), page = query.page, "fetch projects");
        Ok(search(&self.directory.projects, query))
    }

    fn managers(&self, query: &PageQuery) -> Result<Page<Manager>, ApiError> {
        tracing::debug!(search = query.needle(), page = query.page, "fetch managers");
        Ok(search(&self.directory.managers, query))
    }

    fn allocations(&self, query: &AllocationQuery) -> Result<Page<Allocation>, ApiError> {
        let hits: Vec<Allocation> = self
            .data
            .allocations
            .iter()
            .filter(|a| query.employee_id.is_none_or(|id| a.employee_id == id))
            .cloned()
            .collect();
        Ok(Page::paginate(hits, query.page, query.size))
    }

    fn allocation(&self, id: u64) -> Result<Allocation, ApiError> {
        self.data.get(id).cloned().ok_or(ApiError::NotFound {
            kind: "allocation",
            id,
        })
    }

    fn create_allocation(
        &mut self,
        request: &CreateAllocationRequest,
    ) -> Result<Allocation, ApiError> {
        let candidate = Allocation {
            id: 0,
            employee_id: request.employee_id,
            project_id: request.project_id,
            start_date: request.start_date,
            end_date: request.end_date,
            allocation_type: request.allocation_type,
            current_month_allocation: request.current_month_allocation,
            monthly_allocations: request.monthly_allocations.clone().unwrap_or_default(),
        };
        let mut record = self.vet(candidate, None).inspect_err(|err| {
            tracing::warn!(error = %err, "create rejected");
        })?;
        record.id = self.data.allocate_id();
        self.data.insert(record.clone());
        self.persist()?;
        tracing::info!(id = record.id, employee = record.employee_id, "allocation created");
        Ok(record)
    }

    fn replace_allocation(
        &mut self,
        id: u64,
        request: &UpdateAllocationRequest,
    ) -> Result<Allocation, ApiError> {
        let existing = self.allocation(id)?;
        let candidate = apply_update(&existing, request);
        let record = self.vet(candidate, Some(id)).inspect_err(|err| {
            tracing::warn!(id, error = %err, "update rejected");
        })?;
        self.data.replace(record.clone());
        self.persist()?;
        tracing::info!(id, "allocation updated");
        Ok(record)
    }

    fn delete_allocation(&mut self, id: u64) -> Result<(), ApiError> {
        if self.data.remove(id) {
            self.persist()?;
            tracing::info!(id, "allocation deleted");
        }
        Ok(())
    }
}

/// Allocation types that skip the project reference, for callers building requests.
pub fn project_for(allocation_type: AllocationType, project_id: Option<u64>) -> Option<u64> {
    if allocation_type.requires_project() {
        project_id
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MonthlyAllocation;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mk(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn directory() -> DirectoryData {
        DirectoryData {
            employees: vec![
                Employee {
                    id: 1,
                    name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    manager_id: Some(1),
                },
                Employee {
                    id: 2,
                    name: "Grace Hopper".to_string(),
                    email: "grace@example.com".to_string(),
                    manager_id: None,
                },
            ],
            projects: vec![Project {
                id: 1,
                name: "Atlas".to_string(),
                client: None,
            }],
            managers: vec![Manager {
                id: 1,
                name: "Charles Babbage".to_string(),
            }],
        }
    }

    fn api() -> LocalApi {
        LocalApi::in_memory(directory(), AllocationData::default())
    }

    fn uniform_request(employee_id: u64, pct: u8) -> CreateAllocationRequest {
        CreateAllocationRequest {
            employee_id,
            project_id: Some(1),
            start_date: d(2025, 1, 1),
            end_date: d(2025, 3, 31),
            allocation_type: AllocationType::Project,
            year: 2025,
            current_month_allocation: Some(pct),
            monthly_allocations: None,
        }
    }

    fn per_month_request(values: &[(u32, u8)]) -> CreateAllocationRequest {
        CreateAllocationRequest {
            current_month_allocation: None,
            monthly_allocations: Some(
                values
                    .iter()
                    .map(|(m, p)| MonthlyAllocation::new(mk(2025, *m), *p))
                    .collect(),
            ),
            ..uniform_request(1, 0)
        }
    }

    fn update_from(existing: &Allocation) -> UpdateAllocationRequest {
        UpdateAllocationRequest {
            employee_id: existing.employee_id,
            project_id: existing.project_id,
            start_date: existing.start_date,
            end_date: existing.end_date,
            allocation_type: existing.allocation_type,
            current_month_allocation: None,
            monthly_allocations: None,
        }
    }

    #[test]
    fn test_search_employees_by_name() {
        let api = api();
        let page = api
            .employees(&PageQuery::new(0, 10).with_search("grace"))
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, 2);
    }

    #[test]
    fn test_search_managers_and_projects() {
        let api = api();
        assert_eq!(api.managers(&PageQuery::new(0, 10)).unwrap().total, 1);
        assert_eq!(
            api.projects(&PageQuery::new(0, 10).with_search("nothing"))
                .unwrap()
                .total,
            0
        );
    }

    #[test]
    fn test_create_assigns_ids() {
        let mut api = api();
        let a = api.create_allocation(&uniform_request(1, 40)).unwrap();
        let b = api.create_allocation(&uniform_request(2, 40)).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(api.allocation(2).unwrap().employee_id, 2);
    }

    #[test]
    fn test_create_rejects_unknown_employee() {
        let mut api = api();
        let err = api.create_allocation(&uniform_request(99, 40)).unwrap_err();
        assert_eq!(err.user_message(), "unknown employee 99");
    }

    #[test]
    fn test_create_rejects_project_on_vacation() {
        let mut api = api();
        let mut req = uniform_request(1, 100);
        req.allocation_type = AllocationType::Vacation;
        assert!(matches!(
            api.create_allocation(&req),
            Err(ApiError::Rejected(_))
        ));
        req.project_id = project_for(req.allocation_type, req.project_id);
        assert!(api.create_allocation(&req).is_ok());
    }

    #[test]
    fn test_create_rejects_over_allocation() {
        let mut api = api();
        api.create_allocation(&uniform_request(1, 60)).unwrap();
        let err = api.create_allocation(&uniform_request(1, 50)).unwrap_err();
        assert_eq!(
            err.user_message(),
            "Ada Lovelace would be allocated 110% in Jan 2025"
        );
        // Another employee is unaffected
        assert!(api.create_allocation(&uniform_request(2, 50)).is_ok());
    }

    #[test]
    fn test_create_rejects_incomplete_month_list() {
        let mut api = api();
        let err = api
            .create_allocation(&per_month_request(&[(1, 50), (2, 50)]))
            .unwrap_err();
        assert_eq!(err.user_message(), "missing percentage for Mar 2025");
    }

    #[test]
    fn test_create_rejects_month_outside_range() {
        let mut api = api();
        let err = api
            .create_allocation(&per_month_request(&[(1, 50), (2, 50), (3, 50), (4, 50)]))
            .unwrap_err();
        assert_eq!(err.user_message(), "Apr 2025 is outside the allocation range");
    }

    #[test]
    fn test_update_diff_merges_with_stored_months() {
        let mut api = api();
        let created = api
            .create_allocation(&per_month_request(&[(1, 10), (2, 20), (3, 30)]))
            .unwrap();
        let mut req = update_from(&created);
        req.monthly_allocations = Some(vec![MonthlyAllocation::new(mk(2025, 2), 25)]);
        let updated = api.replace_allocation(created.id, &req).unwrap();
        let pcts: Vec<u8> = updated
            .monthly_allocations
            .iter()
            .map(|m| m.percentage)
            .collect();
        assert_eq!(pcts, vec![10, 25, 30]);
    }

    #[test]
    fn test_update_uniform_to_per_month_expands_stored_value() {
        let mut api = api();
        let created = api.create_allocation(&uniform_request(1, 50)).unwrap();
        let mut req = update_from(&created);
        req.end_date = d(2025, 4, 30);
        req.monthly_allocations = Some(vec![MonthlyAllocation::new(mk(2025, 4), 20)]);
        let updated = api.replace_allocation(created.id, &req).unwrap();
        assert_eq!(updated.current_month_allocation, None);
        assert_eq!(updated.monthly_allocations.len(), 4);
        assert_eq!(updated.percentage_for(mk(2025, 1)), Some(50));
        assert_eq!(updated.percentage_for(mk(2025, 4)), Some(20));
    }

    #[test]
    fn test_update_shrinking_range_drops_months() {
        let mut api = api();
        let created = api
            .create_allocation(&per_month_request(&[(1, 10), (2, 20), (3, 30)]))
            .unwrap();
        let mut req = update_from(&created);
        req.end_date = d(2025, 1, 31);
        let updated = api.replace_allocation(created.id, &req).unwrap();
        assert_eq!(
            updated.monthly_allocations,
            vec![MonthlyAllocation::new(mk(2025, 1), 10)]
        );
    }

    #[test]
    fn test_update_excludes_own_record_from_capacity() {
        let mut api = api();
        let created = api.create_allocation(&uniform_request(1, 90)).unwrap();
        let mut req = update_from(&created);
        req.current_month_allocation = Some(100);
        assert!(api.replace_allocation(created.id, &req).is_ok());
    }

    #[test]
    fn test_update_missing_allocation_is_not_found() {
        let mut api = api();
        let req = UpdateAllocationRequest {
            employee_id: 1,
            project_id: Some(1),
            start_date: d(2025, 1, 1),
            end_date: d(2025, 1, 31),
            allocation_type: AllocationType::Project,
            current_month_allocation: Some(10),
            monthly_allocations: None,
        };
        assert!(matches!(
            api.replace_allocation(5, &req),
            Err(ApiError::NotFound { id: 5, .. })
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut api = api();
        let created = api.create_allocation(&uniform_request(1, 40)).unwrap();
        api.delete_allocation(created.id).unwrap();
        api.delete_allocation(created.id).unwrap();
        assert!(api.allocation(created.id).is_err());
    }

    #[test]
    fn test_allocations_filter_by_employee() {
        let mut api = api();
        api.create_allocation(&uniform_request(1, 40)).unwrap();
        api.create_allocation(&uniform_request(2, 40)).unwrap();
        let page = api
            .allocations(&AllocationQuery {
                employee_id: Some(2),
                page: 0,
                size: 10,
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].employee_id, 2);
    }

    #[test]
    fn test_open_persists_changes_to_disk() {
        let tmp = TempDir::new().unwrap();
        directory().save_to(tmp.path()).unwrap();
        let mut api = LocalApi::open(tmp.path()).unwrap();
        api.create_allocation(&uniform_request(1, 40)).unwrap();

        let reopened = LocalApi::open(tmp.path()).unwrap();
        assert_eq!(reopened.allocation(1).unwrap().current_month_allocation, Some(40));
    }
}
