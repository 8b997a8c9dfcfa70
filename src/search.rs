use crate::model::{Assignment, Client, Employee, LeaveRequest, Project, Quotation, TrackRecord, User};

/// Anything listed in a table that can be searched and deleted by id.
pub trait Record {
    fn id(&self) -> u64;

    /// Text fields a search query is matched against.
    fn haystack(&self) -> Vec<&str>;
}

impl Record for Client {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Record for Project {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }
}

impl Record for Quotation {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.reference_no.as_str(), self.name.as_str(), self.subject.as_str()]
    }
}

impl Record for Employee {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.designation.as_str(), self.email.as_str()]
    }
}

impl Record for LeaveRequest {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        let mut fields = vec![self.subject.as_str(), self.status.as_str()];
        if let Some(name) = &self.employee_name {
            fields.push(name);
        }
        fields
    }
}

impl Record for Assignment {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        [&self.project_name, &self.employee_name]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect()
    }
}

impl Record for TrackRecord {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.status.as_str(), self.challenges.as_str()]
    }
}

impl Record for User {
    fn id(&self) -> u64 {
        self.id
    }

    fn haystack(&self) -> Vec<&str> {
        vec![self.username.as_str(), self.role.as_str()]
    }
}

/// Case-insensitive substring match; a blank query keeps everything.
pub fn filter_records<'a, T: Record>(records: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| r.haystack().iter().any(|field| field.to_lowercase().contains(&needle)))
        .collect()
}

/// Drops the record with `id` from the locally held list, keeping the order of
/// the rest. Returns the removed record.
pub fn remove_by_id<T: Record>(records: &mut Vec<T>, id: u64) -> Option<T> {
    let idx = records.iter().position(|r| r.id() == id)?;
    Some(records.remove(idx))
}

pub fn find_by_id<T: Record>(records: &[T], id: u64) -> Option<&T> {
    records.iter().find(|r| r.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: u64, name: &str) -> Client {
        Client { id, name: name.to_string(), created_at: None }
    }

    fn clients() -> Vec<Client> {
        vec![
            client(1, "Shree Engineering Works"),
            client(2, "Apex Fabricators"),
            client(3, "engineering solutions pvt ltd"),
        ]
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let all = clients();
        let hits: Vec<u64> = filter_records(&all, "ENGINEER").iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn blank_query_keeps_everything() {
        let all = clients();
        assert_eq!(filter_records(&all, "   ").len(), 3);
    }

    #[test]
    fn no_match_is_empty() {
        let all = clients();
        assert!(filter_records(&all, "zinc").is_empty());
    }

    #[test]
    fn project_search_covers_description() {
        let projects = vec![Project {
            id: 9,
            client_id: 1,
            name: "Conveyor".into(),
            description: "Replace Gearbox on line 2".into(),
            created_at: None,
        }];
        assert_eq!(filter_records(&projects, "gearbox").len(), 1);
    }

    #[test]
    fn delete_removes_exactly_the_target() {
        let mut all = clients();
        let removed = remove_by_id(&mut all, 2).unwrap();
        assert_eq!(removed.name, "Apex Fabricators");
        let ids: Vec<u64> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn delete_of_unknown_id_leaves_list_alone() {
        let mut all = clients();
        assert!(remove_by_id(&mut all, 42).is_none());
        assert_eq!(all.len(), 3);
    }
}
